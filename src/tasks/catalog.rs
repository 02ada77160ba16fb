//! Built-in task catalog.
//!
//! Defines the seven anomaly-detection task types together with the topics,
//! exam styles, anomaly factors and worked example each one is drafted from.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::problem::ProblemContent;

/// Identifier of a benchmark task type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TaskId {
    T1,
    T2,
    T3,
    T4,
    T5,
    T6,
    T7,
}

impl TaskId {
    /// Returns all task identifiers in catalog order.
    pub fn all() -> Vec<TaskId> {
        vec![
            TaskId::T1,
            TaskId::T2,
            TaskId::T3,
            TaskId::T4,
            TaskId::T5,
            TaskId::T6,
            TaskId::T7,
        ]
    }

    /// Returns the identifier as written in datasets ("T1".."T7").
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskId::T1 => "T1",
            TaskId::T2 => "T2",
            TaskId::T3 => "T3",
            TaskId::T4 => "T4",
            TaskId::T5 => "T5",
            TaskId::T6 => "T6",
            TaskId::T7 => "T7",
        }
    }

    /// Answer format of this task.
    pub fn kind(&self) -> TaskKind {
        match self {
            TaskId::T2 => TaskKind::Binary,
            _ => TaskKind::Index,
        }
    }

    /// Layout of the problem body.
    pub fn shape(&self) -> ContentShape {
        match self {
            TaskId::T2 => ContentShape::Coherence,
            TaskId::T3 => ContentShape::Blank,
            TaskId::T4 => ContentShape::Bridge,
            TaskId::T1 | TaskId::T5 | TaskId::T6 | TaskId::T7 => ContentShape::Context,
        }
    }

    /// Catalog entry for this task.
    pub fn spec(&self) -> &'static TaskSpec {
        match self {
            TaskId::T1 => &TASKS[0],
            TaskId::T2 => &TASKS[1],
            TaskId::T3 => &TASKS[2],
            TaskId::T4 => &TASKS[3],
            TaskId::T5 => &TASKS[4],
            TaskId::T6 => &TASKS[5],
            TaskId::T7 => &TASKS[6],
        }
    }

    /// Display name of the task.
    pub fn name(&self) -> &'static str {
        self.spec().name
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "T1" => Ok(TaskId::T1),
            "T2" => Ok(TaskId::T2),
            "T3" => Ok(TaskId::T3),
            "T4" => Ok(TaskId::T4),
            "T5" => Ok(TaskId::T5),
            "T6" => Ok(TaskId::T6),
            "T7" => Ok(TaskId::T7),
            other => Err(format!("Unknown task id '{}' (expected T1..T7)", other)),
        }
    }
}

/// How a task's answer is expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    /// Pick the anomalous option by position.
    Index,
    /// Judge the passage coherent or not.
    Binary,
}

/// Field layout of a problem body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentShape {
    /// `context` + `anomaly_index`
    Context,
    /// `context` + `is_coherent`
    Coherence,
    /// `sentence` + `choices` + `anomaly_index`
    Blank,
    /// `paragraph_1` + `paragraph_2` + `bridges` + `anomaly_index`
    Bridge,
}

/// Worked example shown to the drafting model.
#[derive(Debug, Clone, Copy)]
pub enum TaskExample {
    Context {
        context: &'static [&'static str],
        anomaly_index: usize,
    },
    Coherence {
        context: &'static [&'static str],
        is_coherent: bool,
    },
    Blank {
        sentence: &'static str,
        choices: &'static [&'static str],
        anomaly_index: usize,
    },
    Bridge {
        paragraph_1: &'static [&'static str],
        paragraph_2: &'static [&'static str],
        bridges: &'static [&'static str],
        anomaly_index: usize,
    },
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl TaskExample {
    /// Converts the example into owned problem content.
    pub fn to_content(&self) -> ProblemContent {
        match *self {
            TaskExample::Context {
                context,
                anomaly_index,
            } => ProblemContent::Context {
                context: owned(context),
                anomaly_index,
            },
            TaskExample::Coherence {
                context,
                is_coherent,
            } => ProblemContent::Coherence {
                context: owned(context),
                is_coherent,
            },
            TaskExample::Blank {
                sentence,
                choices,
                anomaly_index,
            } => ProblemContent::Blank {
                sentence: sentence.to_string(),
                choices: owned(choices),
                anomaly_index,
            },
            TaskExample::Bridge {
                paragraph_1,
                paragraph_2,
                bridges,
                anomaly_index,
            } => ProblemContent::Bridge {
                paragraph_1: owned(paragraph_1),
                paragraph_2: owned(paragraph_2),
                bridges: owned(bridges),
                anomaly_index,
            },
        }
    }
}

/// Catalog entry describing how to draft one task type.
#[derive(Debug, Clone)]
pub struct TaskSpec {
    pub id: TaskId,
    pub name: &'static str,
    pub kind: TaskKind,
    /// Topics cycled round-robin across samples.
    pub topics: &'static [&'static str],
    /// Exam styles cycled round-robin across samples.
    pub styles: &'static [&'static str],
    /// Anomaly factors, one picked uniformly per sample.
    pub factors: &'static [&'static str],
    pub example: Option<TaskExample>,
}

/// Static array of all task specs, indexed in `TaskId` order.
pub static TASKS: &[TaskSpec] = &[
    TaskSpec {
        id: TaskId::T1,
        name: "Sentence Context Anomaly",
        kind: TaskKind::Index,
        topics: &["philosophy", "society", "psychology"],
        styles: &["GRE"],
        factors: &["minor topic shift", "semantic deviation"],
        example: Some(TaskExample::Context {
            context: &[
                "Utilitarianism, as articulated by Jeremy Bentham, evaluates actions based on their capacity to produce pleasure and minimize pain.",
                "John Stuart Mill refined this theory by distinguishing between higher and lower forms of pleasure.",
                "Critics have challenged utilitarianism for failing to account for justice or rights in its calculus of utility.",
                "Nonetheless, the theory remains influential in contemporary policy-making, especially in public health and welfare economics.",
                "Some argue that utilitarianism justifies deception in all cases, as long as it produces personal satisfaction.",
            ],
            anomaly_index: 4,
        }),
    },
    TaskSpec {
        id: TaskId::T2,
        name: "Paragraph Order Consistency",
        kind: TaskKind::Binary,
        topics: &["science", "economics", "politics"],
        styles: &["LSAT", "GMAT"],
        factors: &["sentence reordering"],
        example: Some(TaskExample::Coherence {
            context: &[
                "The expansion of urban green spaces has been linked to lower stress levels and improved mental well-being.",
                "However, the distribution of such spaces often favors wealthier neighborhoods.",
                "Urban planners are increasingly interested in how access to nature affects long-term public health outcomes.",
                "This raises equity concerns, particularly for marginalized communities with limited access to parks or tree cover.",
                "As a result, some cities have adopted policies that prioritize green space development in underserved areas.",
            ],
            is_coherent: false,
        }),
    },
    TaskSpec {
        id: TaskId::T3,
        name: "Blank-based Choice Anomaly",
        kind: TaskKind::Index,
        topics: &["literature", "psychology", "philosophy"],
        styles: &["GRE"],
        factors: &["lexical fit", "collocation"],
        example: Some(TaskExample::Blank {
            sentence: "In the early 2000s, the widespread adoption of _____ began to reshape how people interacted socially, particularly among young adults.",
            choices: &[
                "online forums",
                "instant messaging platforms",
                "MySpace",
                "mobile dating apps",
                "blogging communities",
            ],
            anomaly_index: 3,
        }),
    },
    TaskSpec {
        id: TaskId::T4,
        name: "Bridge Sentence Evaluation",
        kind: TaskKind::Index,
        topics: &["economics", "society", "policy"],
        styles: &["GMAT", "LSAT"],
        factors: &["weak logical connection", "abrupt topic shift"],
        example: Some(TaskExample::Bridge {
            paragraph_1: &[
                "Cryptocurrencies have rapidly emerged as an alternative to traditional fiat currencies, attracting both retail investors and institutional interest.",
                "Despite their promise, concerns over volatility and lack of regulation remain significant barriers to widespread adoption.",
            ],
            paragraph_2: &[
                "Central banks around the world are now exploring the issuance of digital currencies to modernize payment systems and retain monetary control.",
                "These central bank digital currencies (CBDCs) aim to offer the convenience of crypto while maintaining the stability and trust of government-issued money.",
            ],
            bridges: &[
                "CBDCs are essentially government-sanctioned counterparts to decentralized cryptocurrencies.",
                "This shift from cash to digital forms reflects an ongoing trend toward financial innovation.",
                "While crypto investors seek returns, central banks prioritize macroeconomic stability.",
                "The increasing use of digital wallets has made the user experience of CBDCs nearly indistinguishable from that of crypto.",
                "Smart contracts enable automated transactions without third-party intermediaries, revolutionizing how finance operates.",
            ],
            anomaly_index: 4,
        }),
    },
    TaskSpec {
        id: TaskId::T5,
        name: "Referential Ambiguity",
        kind: TaskKind::Index,
        topics: &["psychology", "literature", "philosophy"],
        styles: &["GRE"],
        factors: &["ambiguous pronouns", "unclear referents"],
        example: Some(TaskExample::Context {
            context: &[
                "Descartes' dualism posits a clear distinction between mind and body, each governed by different principles.",
                "He argued that while the body operates in the physical world, the mind is non-material and indivisible.",
                "Spinoza rejected this view, asserting that both are attributes of a single substance.",
                "Although he elaborated this idea in his Ethics, its reception was mixed due to its abstract nature.",
                "This led many to question whether he was opposing Descartes or merely reframing it.",
            ],
            anomaly_index: 4,
        }),
    },
    TaskSpec {
        id: TaskId::T6,
        name: "Logical Contradiction",
        kind: TaskKind::Index,
        topics: &["science", "economics", "politics"],
        styles: &["LSAT", "GMAT"],
        factors: &["contradictory claims", "causal reversal"],
        example: Some(TaskExample::Context {
            context: &[
                "A recent study found that people who consume diets rich in plant-based foods have lower rates of heart disease.",
                "Researchers also noted that moderate red wine consumption may offer cardiovascular benefits.",
                "Other studies suggest that regular exercise improves heart health across all age groups.",
                "However, one clinical trial concluded that individuals with the highest plant-based intake had significantly higher cholesterol levels.",
                "Despite some debate, most medical professionals recommend a combination of diet and exercise for heart health.",
            ],
            anomaly_index: 3,
        }),
    },
    TaskSpec {
        id: TaskId::T7,
        name: "Tone / Style Violation",
        kind: TaskKind::Index,
        topics: &["literature", "philosophy"],
        styles: &["GRE"],
        factors: &["tone shift", "register mismatch"],
        example: Some(TaskExample::Context {
            context: &[
                "Nietzsche\u{2019}s critique of morality centers on the idea that traditional ethical systems are rooted in ressentiment.",
                "He distinguishes between master and slave morality, the latter arising from the inversion of noble values.",
                "Rather than promoting strength, modern morality, in his view, elevates weakness and conformity.",
                "This analysis has had lasting impact on existential and postmodern thought.",
                "It\u{2019}s kind of like when people pretend to be nice just to look good\u{2014}totally fake.",
            ],
            anomaly_index: 4,
        }),
    },
];

/// Looks up a task by its textual identifier.
pub fn get_task(id: &str) -> Option<&'static TaskSpec> {
    id.parse::<TaskId>().ok().map(|task| task.spec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_is_indexed_by_task_id() {
        assert_eq!(TASKS.len(), 7);
        for task in TaskId::all() {
            assert_eq!(task.spec().id, task, "catalog entry out of order for {}", task);
            assert_eq!(task.spec().kind, task.kind());
        }
    }

    #[test]
    fn test_every_task_has_draft_material() {
        for spec in TASKS {
            assert!(!spec.topics.is_empty(), "{} has no topics", spec.id);
            assert!(!spec.styles.is_empty(), "{} has no styles", spec.id);
            assert!(!spec.factors.is_empty(), "{} has no factors", spec.id);
        }
    }

    #[test]
    fn test_examples_match_task_shape_and_are_in_range() {
        for spec in TASKS {
            let example = spec.example.expect("built-in tasks carry an example");
            let content = example.to_content();
            assert_eq!(content.shape(), spec.id.shape(), "{}", spec.id);
            content
                .validate_for(spec.id)
                .unwrap_or_else(|e| panic!("{} example invalid: {}", spec.id, e));
        }
    }

    #[test]
    fn test_task_id_parsing() {
        assert_eq!("t3".parse::<TaskId>(), Ok(TaskId::T3));
        assert_eq!(" T7 ".parse::<TaskId>(), Ok(TaskId::T7));
        assert!("T8".parse::<TaskId>().is_err());
        assert_eq!(get_task("T2").map(|t| t.name), Some("Paragraph Order Consistency"));
    }

    #[test]
    fn test_task_id_serde() {
        let json = serde_json::to_string(&TaskId::T4).expect("serializes");
        assert_eq!(json, "\"T4\"");
        let parsed: TaskId = serde_json::from_str("\"T5\"").expect("parses");
        assert_eq!(parsed, TaskId::T5);
    }

    #[test]
    fn test_only_t2_is_binary() {
        let binary: Vec<TaskId> = TaskId::all()
            .into_iter()
            .filter(|t| t.kind() == TaskKind::Binary)
            .collect();
        assert_eq!(binary, vec![TaskId::T2]);
    }
}
