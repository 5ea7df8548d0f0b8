use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// 進度條寬度（格數）
pub const BAR_LENGTH: u64 = 50;

/// 長時間模擬用的文字進度條。
///
/// 只在 `position * 50` 為 `max` 的整數倍時重繪，避免每一步都寫入終端。
/// 停用時不輸出任何內容。
pub struct LoadingBar {
    bar: Option<ProgressBar>,
    max: u64,
}

impl LoadingBar {
    pub fn new(text: &str, max: u64) -> Self {
        Self::with_draw_target(text, max, ProgressDrawTarget::stderr())
    }

    fn with_draw_target(text: &str, max: u64, target: ProgressDrawTarget) -> Self {
        let bar = ProgressBar::with_draw_target(Some(BAR_LENGTH), target);
        bar.set_style(
            ProgressStyle::with_template("{msg:<20} [{bar:50}]")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("= "),
        );
        bar.set_message(text.to_string());
        Self {
            bar: Some(bar),
            max,
        }
    }

    pub fn hidden(max: u64) -> Self {
        Self { bar: None, max }
    }

    /// 回報目前進度 `position`（0..=max）
    pub fn update(&self, position: u64) {
        let Some(bar) = &self.bar else {
            return;
        };
        if self.max == 0 || (position * BAR_LENGTH) % self.max != 0 {
            return;
        }

        bar.set_position(cells(position, self.max));
        if position == self.max {
            bar.finish();
        }
    }

    pub fn is_visible(&self) -> bool {
        self.bar.is_some()
    }
}

/// 已填滿的格數
pub fn cells(position: u64, max: u64) -> u64 {
    if max == 0 {
        return BAR_LENGTH;
    }
    (position.min(max) * BAR_LENGTH) / max
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cells_are_proportional() {
        assert_eq!(cells(0, 100), 0);
        assert_eq!(cells(50, 100), 25);
        assert_eq!(cells(100, 100), 50);
        assert_eq!(cells(150, 100), 50);
        assert_eq!(cells(3, 0), 50);
    }

    #[test]
    fn test_visible_bar_moves_only_on_whole_cells() {
        let loading = LoadingBar::with_draw_target("Simulating", 200, ProgressDrawTarget::hidden());
        assert!(loading.is_visible());
        let bar = loading.bar.as_ref().unwrap();

        // 1 * 50 不是 200 的倍數，不重繪
        loading.update(1);
        assert_eq!(bar.position(), 0);

        loading.update(4);
        assert_eq!(bar.position(), 1);
        assert!(!bar.is_finished());

        loading.update(100);
        assert_eq!(bar.position(), 25);

        loading.update(200);
        assert_eq!(bar.position(), BAR_LENGTH);
        assert!(bar.is_finished());
    }

    #[test]
    fn test_hidden_bar_ignores_updates() {
        let bar = LoadingBar::hidden(10);
        assert!(!bar.is_visible());
        for i in 0..=10 {
            bar.update(i);
        }
    }
}
