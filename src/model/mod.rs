pub mod appointment;
pub mod assignment;
pub mod employee;
pub mod time_log;
pub mod work_hours;
