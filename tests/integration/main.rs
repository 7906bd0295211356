mod common;
mod multi_thread;
mod single_thread;
