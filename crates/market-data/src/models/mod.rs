//! Data models for the market data crate.

mod company;
mod credentials;
mod derivative;
mod partial;

pub use company::{derive_wkn, CompanyInfo, InstrumentCategory};
pub use credentials::ProviderCredentialSet;
pub use derivative::DerivativeInfo;
pub use partial::PartialRecord;
