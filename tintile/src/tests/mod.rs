mod edges;
mod pipeline;
mod support;
mod surface;
