//! `ensemble strategies` - list workflow strategies.

use colored::Colorize;
use ensemble_orchestrator::WorkflowStrategy;

fn describe(strategy: WorkflowStrategy) -> (&'static str, &'static str) {
    match strategy {
        WorkflowStrategy::Sequential => ("Agents in configured order every round", "sequential"),
        WorkflowStrategy::Reverse => ("Agents in reverse configured order", "sequential_reverse"),
        WorkflowStrategy::Random => ("Agents reshuffled every round (seedable)", "-"),
        WorkflowStrategy::LlmRouted => ("Each decision may name the next agent", "dynamic, llm"),
        WorkflowStrategy::ManagerDirected => {
            ("A manager opens; every decision names the next agent", "managed, hierarchical")
        }
    }
}

/// Execute the strategies command.
pub fn execute() {
    println!("{}", "Workflow strategies".bold().cyan());
    println!();
    for strategy in WorkflowStrategy::ALL {
        let (description, aliases) = describe(strategy);
        println!("  {:<18} {}", strategy.to_string().bold(), description);
        println!("  {:<18} {}", "", format!("aliases: {}", aliases).dimmed());
    }
}
