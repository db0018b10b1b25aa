// coursepay/src/model/mod.rs

pub mod course;
pub mod enrollment;
pub mod ids;
pub mod payment;
pub mod sale;
pub mod session;

pub use course::Course;
pub use enrollment::Enrollment;
pub use ids::{CourseId, IdError, UserId};
pub use payment::{GatewayTransaction, PaymentStatus, VerifiedPayment};
pub use sale::{NewSale, Sale, SaleStatus};
pub use session::{SessionContext, SessionUser};
