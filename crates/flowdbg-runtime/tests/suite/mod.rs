mod harness;

mod session_manager;
