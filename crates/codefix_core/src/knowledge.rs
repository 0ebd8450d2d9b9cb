use std::path::Path;

use anyhow::Result;

use crate::error::CodefixError;
use crate::model::BugExample;
use crate::storage;

/// The curated example set, loaded wholesale at startup and immutable for
/// the life of the process.
#[derive(Debug, Clone)]
pub struct KnowledgeBase {
    examples: Vec<BugExample>,
}

impl KnowledgeBase {
    /// Load a JSON array of examples. A missing file falls back to the
    /// built-in default set; a file that exists but does not parse is an
    /// error, not a fallback.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!(
                path = %path.display(),
                "examples file not found, using built-in defaults"
            );
            return Self::from_examples(default_examples());
        }
        Self::from_examples(storage::load_examples_json(path)?)
    }

    pub fn from_examples(examples: Vec<BugExample>) -> Result<Self> {
        if examples.is_empty() {
            return Err(CodefixError::EmptyKnowledgeBase.into());
        }
        for example in &examples {
            if example.description.trim().is_empty() {
                return Err(CodefixError::BlankDescription {
                    title: example.title.clone(),
                }
                .into());
            }
        }
        Ok(Self { examples })
    }

    pub fn examples(&self) -> &[BugExample] {
        &self.examples
    }

    pub fn len(&self) -> usize {
        self.examples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    /// Description texts in knowledge-base order; these are what get embedded.
    pub fn descriptions(&self) -> Vec<&str> {
        self.examples
            .iter()
            .map(|example| example.description.as_str())
            .collect()
    }
}

/// Built-in fallback set used when no examples file exists.
pub fn default_examples() -> Vec<BugExample> {
    vec![
        BugExample {
            title: "Fix React State Mutation".to_string(),
            description: "React component not updating when state changes. Direct mutation of \
                          state objects/arrays doesn't trigger re-renders."
                .to_string(),
            solution: "React doesn't detect direct state mutations. You need to create new \
                       objects/arrays to trigger re-renders. Use the spread operator or create \
                       new instances."
                .to_string(),
            code_example: "// Wrong: direct mutation\ntodos.push(item);\nsetTodos(todos);\n\n// \
                           Right: new array\nsetTodos([...todos, item]);"
                .to_string(),
            source: "React Documentation - State Updates".to_string(),
            tags: vec![
                "react".to_string(),
                "state".to_string(),
                "mutation".to_string(),
                "hooks".to_string(),
            ],
            keywords: vec![
                "state".to_string(),
                "update".to_string(),
                "mutation".to_string(),
                "re-render".to_string(),
                "useState".to_string(),
            ],
        },
        BugExample {
            title: "Fix useEffect Infinite Loop".to_string(),
            description: "useEffect hook running infinitely, causing performance issues and \
                          potential crashes."
                .to_string(),
            solution: "useEffect runs when dependencies change. If you're setting state inside \
                       useEffect without proper dependencies, it can create infinite loops. Add \
                       missing dependencies or use useCallback/useMemo."
                .to_string(),
            code_example: "// Wrong: infinite loop\nuseEffect(() => {\n  setCount(count + \
                           1);\n}, []);\n\n// Right: functional update\nuseEffect(() => {\n  \
                           setCount(prev => prev + 1);\n}, []);"
                .to_string(),
            source: "React Hooks Documentation".to_string(),
            tags: vec![
                "react".to_string(),
                "useEffect".to_string(),
                "hooks".to_string(),
                "infinite-loop".to_string(),
            ],
            keywords: vec![
                "useEffect".to_string(),
                "infinite".to_string(),
                "loop".to_string(),
                "dependency".to_string(),
                "hooks".to_string(),
            ],
        },
        BugExample {
            title: "Fix Event Handler Binding".to_string(),
            description: "Event handlers not working properly, especially in loops or when \
                          passing functions as props."
                .to_string(),
            solution: "Event handlers need proper binding or should be defined as arrow \
                       functions to preserve 'this' context. Use arrow functions or bind \
                       methods properly."
                .to_string(),
            code_example: "// Wrong: loses context\n<button \
                           onClick={this.handleClick}>Click</button>\n\n// Right: arrow \
                           function preserves context\n<button onClick={() => \
                           this.handleClick()}>Click</button>"
                .to_string(),
            source: "React Event Handling Documentation".to_string(),
            tags: vec![
                "react".to_string(),
                "events".to_string(),
                "binding".to_string(),
                "handlers".to_string(),
            ],
            keywords: vec![
                "event".to_string(),
                "handler".to_string(),
                "binding".to_string(),
                "onClick".to_string(),
                "context".to_string(),
            ],
        },
    ]
}
