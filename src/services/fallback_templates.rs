//! Static decomposition templates.
//!
//! Used when the decomposition collaborator fails or returns nothing. Every
//! (type, complexity) pair maps to a non-empty, acyclic list of steps.

use crate::domain::models::{Complexity, SubTaskSeed, TaskType};

fn steps(task_type: TaskType) -> &'static [&'static str] {
    match task_type {
        TaskType::Research => &[
            "Identify key questions and sources",
            "Gather information from the sources",
            "Cross-check findings",
            "Summarize findings",
        ],
        TaskType::Development => &[
            "Clarify requirements",
            "Design the solution",
            "Implement the solution",
            "Test the implementation",
        ],
        TaskType::Analysis => &[
            "Collect the relevant data",
            "Clean and prepare the data",
            "Analyze the data",
            "Report conclusions",
        ],
        TaskType::Writing => &[
            "Outline the content",
            "Draft the content",
            "Review and edit the draft",
            "Finalize the text",
        ],
        TaskType::General => &[
            "Understand the request",
            "Carry out the main work",
            "Review the outcome",
            "Summarize the result",
        ],
    }
}

/// Steps for a (type, complexity) pair.
///
/// Simple tasks get two steps in a chain, medium four in a chain. Complex
/// tasks run the two middle steps in parallel between the first and last.
pub fn template_for(task_type: TaskType, complexity: Complexity) -> Vec<SubTaskSeed> {
    let steps = steps(task_type);
    let id = |n: usize| format!("step-{n}");

    match complexity {
        Complexity::Simple => vec![
            SubTaskSeed::new(steps[0]).with_id(id(1)),
            SubTaskSeed::new(steps[3]).with_id(id(2)).depends_on([id(1)]),
        ],
        Complexity::Medium => steps
            .iter()
            .enumerate()
            .map(|(i, step)| {
                let seed = SubTaskSeed::new(*step).with_id(id(i + 1));
                if i == 0 {
                    seed
                } else {
                    seed.depends_on([id(i)])
                }
            })
            .collect(),
        Complexity::Complex => vec![
            SubTaskSeed::new(steps[0]).with_id(id(1)),
            SubTaskSeed::new(steps[1]).with_id(id(2)).depends_on([id(1)]),
            SubTaskSeed::new(steps[2]).with_id(id(3)).depends_on([id(1)]),
            SubTaskSeed::new(steps[3])
                .with_id(id(4))
                .depends_on([id(2), id(3)]),
        ],
    }
}
