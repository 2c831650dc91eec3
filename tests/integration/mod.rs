/// Integration tests exercising the store, gateways, and scheduler together
mod workflow;
