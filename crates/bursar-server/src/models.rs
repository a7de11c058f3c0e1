//! Database models for Bursar.

pub mod account;
pub mod account_transaction;
pub mod enrollment;
pub mod enrollment_fee;
pub mod enrollment_subject;
pub mod payment;
pub mod payment_installment;
pub mod payment_transaction;
pub mod tuition_scheme;

pub use account::Account;
pub use account_transaction::{AccountTransaction, NewAccountTransaction};
pub use enrollment::{BillingStatus, Enrollment, EnrollmentStatus};
pub use enrollment_fee::{EnrollmentFee, FeeType, NewEnrollmentFee};
pub use enrollment_subject::{EnrollmentSubject, Subject};
pub use payment::{NewPayment, Payment, PaymentStatus, PaymentType};
pub use payment_installment::{InstallmentStatus, NewPaymentInstallment, PaymentInstallment};
pub use payment_transaction::{NewPaymentTransaction, PaymentTransaction};
pub use tuition_scheme::{SchemeType, TuitionScheme};
