pub mod context;
pub mod gateways;
pub mod pipelines;
pub mod scripts;

pub use context::Gateways;
pub use scripts::ScriptDeployer;
