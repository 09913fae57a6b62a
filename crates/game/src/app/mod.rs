pub(crate) mod bootstrap;
mod city;
pub(crate) mod loop_runner;
