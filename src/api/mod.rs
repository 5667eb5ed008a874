pub mod assignment;
pub mod time_log;
pub mod work_hours;
