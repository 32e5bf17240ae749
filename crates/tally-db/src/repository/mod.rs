//! # Repositories
//!
//! Plain CRUD for the registry entities. Anything that crosses entities
//! (checkout, purchase receipt, adjustments) belongs to the transaction
//! managers, not here.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Caller ──► ProductRepository ──► SQL ──► SQLite                        │
//! │                                                                         │
//! │  Each repository:                                                       │
//! │  • Wraps the pool (cheap to clone)                                      │
//! │  • Validates input via tally-core before touching SQL                   │
//! │  • Returns domain types, not rows                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod customer;
pub mod product;
pub mod supplier;
