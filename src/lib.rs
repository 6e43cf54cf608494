pub mod constants;
mod execution;
pub mod isochrone;
pub mod localization;
pub mod locator;
pub mod projection;
pub mod propagation;
pub mod report;
pub mod request;
pub mod tdoa_errors;

pub use localization::LocatorParams;
pub use locator::TdoaLocator;
pub use report::LocationReport;
pub use request::LocateRequest;
pub use tdoa_errors::TdoaError;
