//! Longest common subsequence over sibling lists

/// Index pairs of a longest common subsequence of `a` and `b` under `eq`.
///
/// Among equally long solutions the leftmost pairing wins.
pub fn lcs_pairs<T, U, F>(a: &[T], b: &[U], mut eq: F) -> Vec<(usize, usize)>
where
    F: FnMut(&T, &U) -> bool,
{
    let (n, m) = (a.len(), b.len());
    if n == 0 || m == 0 {
        return Vec::new();
    }
    // Suffix table: table[i][j] = LCS length of a[i..] and b[j..].
    let width = m + 1;
    let mut table = vec![0u32; (n + 1) * width];
    let mut same = vec![false; n * m];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            let matched = eq(&a[i], &b[j]);
            same[i * m + j] = matched;
            table[i * width + j] = if matched {
                table[(i + 1) * width + j + 1] + 1
            } else {
                table[(i + 1) * width + j].max(table[i * width + j + 1])
            };
        }
    }

    let mut pairs = Vec::with_capacity(table[0] as usize);
    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if same[i * m + j] && table[i * width + j] == table[(i + 1) * width + j + 1] + 1 {
            pairs.push((i, j));
            i += 1;
            j += 1;
        } else if table[(i + 1) * width + j] >= table[i * width + j + 1] {
            i += 1;
        } else {
            j += 1;
        }
    }
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lcs_basic() {
        let a = ['a', 'b', 'c', 'd'];
        let b = ['b', 'x', 'd'];
        assert_eq!(lcs_pairs(&a, &b, |x, y| x == y), vec![(1, 0), (3, 2)]);
    }

    #[test]
    fn test_lcs_prefers_leftmost() {
        let a = ['x'];
        let b = ['x', 'x'];
        assert_eq!(lcs_pairs(&a, &b, |x, y| x == y), vec![(0, 0)]);
    }

    #[test]
    fn test_lcs_empty() {
        let a: [u8; 0] = [];
        assert!(lcs_pairs(&a, &[1u8], |x, y| x == y).is_empty());
    }
}
