pub mod dataset;
pub mod employee;
pub mod good;
pub mod itemset;
pub mod transaction;

pub use dataset::Dataset;
pub use employee::{Employee, EmployeeId};
pub use good::{Good, GoodId, Group, GroupId};
pub use itemset::Itemset;
pub use transaction::Transaction;
