pub mod cash_flow;
pub mod covenant;
pub mod facility;
pub mod notification;
pub mod user;

pub use cash_flow::{CashFlow, CashFlowStatus};
pub use covenant::{
    CheckFrequency, ComparisonOperator, Covenant, CovenantSource, CovenantStatus, CovenantType,
};
pub use facility::{Facility, FacilityStatus};
pub use notification::{EntityRef, Notification, NotificationKind, NotificationPriority};
pub use user::{Role, Session, User};
