pub mod affinity;
pub mod boost;
pub mod diversity;
pub mod embedding;
pub mod ltr;
pub mod pipeline;
pub mod snapshot;
pub mod topic_graph;

pub use affinity::resolve_affinities;
pub use boost::{flat_topic_boost, BoostComputer, BoostParams};
pub use diversity::{apply_diversity_penalty, DiversityReranker};
pub use embedding::{cosine_similarity, rank_similar, EmbeddingBlender};
pub use ltr::{LtrModel, LtrTreeNode};
pub use pipeline::FeedRanker;
pub use snapshot::Snapshot;
pub use topic_graph::{NaiveDepluralizer, StemPolicy, TopicGraph, TopicStore};
