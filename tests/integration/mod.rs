mod app_flow;
mod estimator;
mod gateway;
mod place_bet;
