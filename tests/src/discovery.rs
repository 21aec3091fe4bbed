mod fakes;
mod integration;
