pub mod error;
pub mod export;
pub mod loan;

pub use error::{LoanError, LoanResult};
pub use loan::{generate, LoanParameters, RepaymentMode, Schedule, ScheduleEntry};
