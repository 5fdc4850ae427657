pub mod alerts_v1;
