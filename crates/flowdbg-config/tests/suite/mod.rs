mod loading;
mod logging;
mod schema;
