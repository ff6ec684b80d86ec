//! Contracts between the binder, the optimizer and their consumers.

mod binder_contract;
mod planner_contract;
