pub mod annotate;
pub mod config;
pub mod filter;
pub mod style;
pub mod tables;

pub use annotate::{Annotator, Attributes};
pub use config::{build_config, AllowLevel, AttributeKind, PolicyConfig, PolicyOverrides};
pub use filter::PolicyFilter;
pub use style::{CssDeclarations, Declaration, DeclarationParser};
