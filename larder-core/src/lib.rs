pub mod ai;
pub mod config;
pub mod error;
pub mod http;
pub mod image;
pub mod manager;
pub mod pantry;

pub use config::AppConfig;
pub use error::FetchError;
pub use http::{HttpClient, MockClient, MockResponse, ReqwestClient};
pub use image::{fetch_and_validate_image, placeholder_png, validate_image, FetchedImage};
pub use manager::{ManagerError, RecipeManager, Submission, SubmissionOutcome};
pub use pantry::{verify_format, Ingredient, IngredientError, IngredientStore};
