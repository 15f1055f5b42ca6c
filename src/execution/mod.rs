//! Query execution: planning, eager-load dispatch and field resolution

pub mod dispatcher;
pub mod executor;
pub mod planner;
pub mod response;
pub mod selection;

pub use dispatcher::EagerLoadDispatcher;
pub use executor::QueryExecutor;
pub use planner::{CollectionKey, CollectionPath, CollectionSegment, EagerLoadPlanner, LoadPlan};
pub use response::{GraphQLError, PathSegment, Response, ResponsePath};
pub use selection::{
    FieldSelection, FragmentSelection, Operation, OperationKind, SelectionItem, collect_fields,
    parse_operation,
};
