pub mod player;
pub mod q_table;
pub mod qlearning_player;
