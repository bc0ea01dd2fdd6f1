pub mod capacity;
pub mod client_resolution;
pub mod config;
pub mod demand;
pub mod events;
pub mod export;
pub mod period;
pub mod recurrence;
pub mod skill_cache;
pub mod skill_mapping;
pub mod skill_resolver;
pub mod skill_validator;
pub mod staff_filter;
pub mod task_scheduler;

#[cfg(test)]
pub(crate) mod test_support;
