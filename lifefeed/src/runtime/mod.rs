pub mod consumer;
pub mod controller;
pub mod events;
pub mod pacer;
pub mod producer;
pub mod renderer;
pub mod storage;
