pub mod claims;
pub mod collateral;
pub mod nitro;
pub mod policy;
pub mod report;
pub mod verification;
