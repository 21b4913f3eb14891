pub mod client;

pub use client::Ec2Inventory;
