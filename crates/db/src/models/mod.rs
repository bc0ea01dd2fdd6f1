pub mod client;
pub mod recurring_task;
pub mod skill;
pub mod skill_refs;
pub mod staff;
pub mod task_instance;
