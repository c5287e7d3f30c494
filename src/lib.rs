pub mod cache;
pub mod context;
pub mod lex;
pub mod metadata;
pub mod resolve;
pub mod translate;

pub use context::{ContextBindings, ContextValue, Session};
pub use resolve::{DefaultValue, resolve_default};
pub use translate::{Untranslatable, translate, try_translate};
