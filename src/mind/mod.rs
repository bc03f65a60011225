pub mod agent;
pub mod artifacts;
pub mod error;
pub mod loader;

pub use agent::{
    Agent, AgentCapabilities, DecisionFunctions, ExecutionType, ExecutorType, TaskAnatomyRules,
    TaskManagementRules, ValidationRules,
};
pub use artifacts::{
    ArtifactLocations, ArtifactSection, DEFAULT_MIND_ID, MarkdownArtifact, MindArtifacts,
    SectionBody,
};
pub use error::{MindError, MindErrorKind};
pub use loader::{MindBundle, MindLoader, MindLoaderOptions, MindMetadata};
