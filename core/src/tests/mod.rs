mod fakes;
mod plain_flow;
