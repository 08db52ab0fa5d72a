mod basic;
mod generation;
mod list;
mod nested;
mod ordered;
mod roots;
mod stress;
mod vector;
