pub mod controller;
pub mod debounce;
pub mod eligibility;
pub mod glossary;
pub mod lookup;
pub mod position;
pub mod selection;
pub mod session;
