//! modbind - binding resolution for game mod install descriptors

pub mod alias;
pub mod autoid;
pub mod descriptor;
pub mod error;
pub mod function;
pub mod grammar;
pub mod provider;
pub mod resolver;
pub mod schema;
pub mod session;
pub mod skip;
pub mod token;
pub mod validate;

pub use alias::AliasTable;
pub use autoid::{AutoIdContext, AutoIdRegistry};
pub use descriptor::{DescriptorEntry, InstallDescriptor};
pub use error::{BindingError, FailureState, FixSuggestion};
pub use function::BindingFunction;
pub use grammar::{BindingCall, BindingExpression};
pub use provider::{
    DbSnapshot, GameDb, IdSpace, MemoryGameDb, MemoryX2m, SkillIds, SkillType, X2mRepo,
};
pub use resolver::{ErrorPolicy, ResolveScope, Resolver, DEFAULT_MAX_AUTO_ID};
pub use schema::{BindingSchema, Installable};
pub use session::BindingSession;
pub use skip::{process_skip_bindings, SkipInherit};
pub use token::{ResolvedValue, NULL_TOKEN, NULL_TOKEN_STR, SKIP_TOKEN, SKIP_TOKEN_STR};
