mod bridge;
mod csma_cd;
mod frame;
mod hub;
mod ip_packet;
mod routing_table;
mod sim_time;
mod simulator;
