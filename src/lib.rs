pub mod config;
pub mod error;
pub mod identity;
pub mod scenario;
pub mod session;

pub use config::LoadConfig;
pub use error::LoadError;
pub use identity::{CityCycle, Identities, SequenceGenerator, UserIdentity, CITIES};
pub use scenario::{user_with_device, StepsRun};
pub use session::UserSession;
