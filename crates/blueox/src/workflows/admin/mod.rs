//! Staff review console, client portal, and signup.

pub mod console;
pub mod domain;
pub mod repository;
pub mod router;
pub mod views;

pub use console::{AdminConsole, AdminError};
pub use domain::{
    Client, ClientId, ClientRole, Document, DocumentId, NewClient, NewDocument, NewPayment, Payment,
    PaymentId, PaymentStatus, DEFAULT_CURRENCY,
};
pub use repository::{AdminStore, ClientRepository, DocumentRepository, PaymentRepository};
pub use router::admin_router;
pub use views::{ApplicationView, Attached, ClientPortal, DashboardCounts, DashboardSnapshot, FieldEntry};
