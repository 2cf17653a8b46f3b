mod api;
mod fanout;
mod hooks;
