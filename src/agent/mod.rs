pub mod q_learner;
