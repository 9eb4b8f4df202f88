//! quartz: an educational single-node relational engine.
//!
//! Tuples of dynamically typed fields persist in 4KB slotted pages on one
//! local file; a bounded buffer pool caches pages with shared/exclusive
//! latching and 2Q replacement; a small SQL dialect compiles through a
//! recursive-descent parser and a rule-based planner into a volcano-style
//! operator tree.
//!
//! ```no_run
//! use quartz::buffer::BufferManager;
//! use quartz::exec::{execute_sql, InsertOperator, Operator};
//! use quartz::field::Field;
//! use quartz::storage::FileManager;
//! use quartz::tuple::Tuple;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let file = FileManager::open("quartz.db", true)?;
//! let buffer = BufferManager::new(file, 10);
//!
//! let mut insert = InsertOperator::new(&buffer);
//! insert.open()?;
//! insert.stage(Tuple::from(vec![
//!     Field::Int(1),
//!     Field::Int(100),
//!     Field::Str("GRADES".into()),
//! ]));
//! insert.next()?;
//! insert.close();
//!
//! let rows = execute_sql("SELECT {*} FROM {GRADES} WHERE {2} >= 90", &buffer)?;
//! # Ok(())
//! # }
//! ```

pub mod buffer;
pub mod exec;
pub mod field;
pub mod sql;
pub mod storage;
pub mod tuple;
