mod artifact;
mod gaps;
mod scenarios;
