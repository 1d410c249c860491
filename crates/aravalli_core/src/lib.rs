pub mod analysis;
pub mod builder;
pub mod domain;
pub mod hotspots;
pub mod ports;
pub mod settings;
pub mod trend;

pub use builder::{BuilderError, BuilderPreview, BuilderStage, SiteBuilder};
pub use domain::{
    AnalysisRecord, AuthSession, DegradationStatus, FileChange, GlobalConfig, NewAnalysis,
    NewUser, PendingWrite, PromptHistoryItem, Role, SettingsRecord, Suggestion, User,
    UserCredentials, Verification,
};
pub use ports::{
    AnalysisSimulator, ChatService, CodeGenerationService, DatabaseService, ImageInsightService,
    PortError, PortResult, SourceFileService, SuggestionService,
};
pub use settings::SettingsService;
