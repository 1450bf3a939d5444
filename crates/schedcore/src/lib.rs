#[macro_use]
pub mod internal;

pub mod connection;

pub use crate::internal::common::ids::{AutoclusterId, ClusterId, JobId, ProcId};
pub use crate::internal::common::{Map, Set};

pub type Error = internal::common::error::SchedError;
pub type Result<T> = std::result::Result<T, Error>;

pub const MAX_FRAME_SIZE: usize = 128 * 1024 * 1024;

pub mod classad {
    pub use crate::internal::classad::ad::JobAd;
    pub use crate::internal::classad::attrs;
    pub use crate::internal::classad::expr::{BinaryOp, EvalContext, Expr, UnaryOp};
    pub use crate::internal::classad::parser::parse_expr;
    pub use crate::internal::classad::status::JobStatus;
    pub use crate::internal::classad::value::Value;
}

pub mod config {
    pub use crate::internal::config::{ParamSource, ParamTable, CONDOR_ENV_PREFIX};
}

pub mod policy {
    pub use crate::internal::policy::firing::{
        FiringInfo, FiringSource, FiringValue, HoldReasonCode, PolicyCheck,
    };
    pub use crate::internal::policy::system::{SystemPolicy, SystemPolicyExpr};
    pub use crate::internal::policy::user::{PolicyAction, PolicyMode, UserPolicy};
}

pub mod negotiate {
    pub use crate::internal::messages::negotiate::{FromScheddMessage, ToScheddMessage};
    pub use crate::internal::negotiate::channel::ScheddChannel;
    pub use crate::internal::negotiate::request::ResourceRequest;
    pub use crate::internal::negotiate::requestlist::{
        DEFAULT_REQUEST_LIST_SIZE, FetchErrorKind, PrefetchStatus, REQUEST_LIST_SIZE_KNOB,
        ResourceRequestList, USE_REQUEST_COUNTS_KNOB,
    };
    pub use crate::internal::negotiate::schedd::{ScheddQueue, serve_negotiation};
}
