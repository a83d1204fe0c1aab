mod blending;
mod matcher;
mod update;
