pub mod next_run;
