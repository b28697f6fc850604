//! Services module - preview building, token signing, field mapping, mock
//! data generation, and sandbox rendering.

pub mod mapping_service;
pub mod mock_data_service;
pub mod preview_service;
pub mod render_service;
pub mod token_service;

// Re-export for convenience
pub use mapping_service::{MappingPayload, MappingResult, MappingService};
pub use mock_data_service::MockDataService;
pub use preview_service::{PreviewBuildError, PreviewService};
pub use render_service::RenderService;
pub use token_service::{PreviewClaims, PreviewTokenService, SharedPreviewTokenService};
