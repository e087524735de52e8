mod invalid_json;
mod resolution;
